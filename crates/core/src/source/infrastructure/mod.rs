pub mod source_resolver;
