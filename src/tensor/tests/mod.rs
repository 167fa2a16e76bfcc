mod shape;
mod slice;
