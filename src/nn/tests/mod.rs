mod node_reshape;
mod node_row_slice;
