//! Gateway log analytics: parse, search, and paginate the gateway's text log.

pub mod engine;
pub mod pagination;
pub mod parse;

#[cfg(test)]
mod test_properties;
