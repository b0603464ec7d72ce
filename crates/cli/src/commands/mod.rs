mod parse;
mod symbols;
mod tokens;

pub(crate) use parse::cmd_parse;
pub(crate) use symbols::cmd_symbols;
pub(crate) use tokens::cmd_tokens;
