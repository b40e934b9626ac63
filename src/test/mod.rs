pub(crate) mod polygon;
