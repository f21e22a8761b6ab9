pub mod ast;
pub mod error;
pub mod id_generator;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

pub use error::{ParseError, ParseResult};
pub use id_generator::IdGenerator;
pub use parser::{parse, parse_fragment, Parser};
pub use serializer::{serialize, Serializer};
pub use tokenizer::{tokenize, Token};
