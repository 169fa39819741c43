//! Property test modules for the composition layer

mod composition;
