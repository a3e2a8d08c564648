//! Regular expressions over sequences of structured tokens.
//!
//! The alphabet of these patterns is not characters but [`Token`]s: opaque
//! mappings from string keys to optional string values. A compiled
//! [`Pattern`] applied to a token sequence reports whether it matches the
//! whole sequence, enumerates every matching subsequence, and exposes
//! per-group token spans and intra-token string captures.
//!
//! # Pattern syntax
//!
//! | Construct             | Meaning                                          |
//! |-----------------------|--------------------------------------------------|
//! | `hello`               | Default key equals `hello`                       |
//! | `"hello world"`       | Quoted literal (`\"` and `\\` escapes)           |
//! | `/he.lo/`             | Default key fully matches a regex                |
//! | `[{key:value}]`       | Value at `key` equals `value`                    |
//! | `[{key:/re/}]`        | Value at `key` fully matches a regex             |
//! | `[{key>=4}]`          | Integer comparison (`< <= > >= = == !=`)         |
//! | `[{!key}]`            | No value at `key`                                |
//! | `[A & B]`, `[A \| B]` | Boolean combination within one token             |
//! | `[!A]`                | Negation within one token                        |
//! | `[]`                  | Any single token                                 |
//! | `^`, `$`              | Start / end of the sequence (zero-width)         |
//! | `X Y`                 | Sequence                                         |
//! | `X \| Y`, `X & Y`     | Disjunction / conjunction of patterns            |
//! | `X*`, `X+`, `X?`      | Greedy repeats (`*?` etc. for reluctant)         |
//! | `X{n}`, `X{n,}`, `X{n,m}` | Bounded repeats                              |
//! | `(X)`, `(?<name> X)`  | Anonymous / named capture group                  |
//! | `$name`               | Substitute a pre-compiled variable               |
//! | `// …`, `/* … */`     | Comments                                         |
//!
//! # Example
//!
//! ```rust
//! use tokre::{MapToken, Pattern};
//!
//! let pattern = Pattern::compile("[{pos:DT}] (?<noun> cat)").unwrap();
//!
//! let sentence = vec![
//!     MapToken::new().with("default", "the").with("pos", "DT"),
//!     MapToken::new().with("default", "cat").with("pos", "NN"),
//! ];
//!
//! let mut matcher = pattern.matcher(&sentence);
//! assert!(matcher.matches().unwrap());
//! let noun = matcher.group_named("noun").unwrap().unwrap();
//! assert_eq!((noun.begin(), noun.end()), (1, 2));
//! ```
//!
//! Matching is an ordered backtracking search: greedy repeats report their
//! longest end first and reluctant repeats their shortest, every operation
//! takes an optional wall-clock deadline (`matches_within`, `find_within`)
//! as the safety net against adversarial patterns, and compiled patterns
//! are immutable and freely shared across threads while each [`Matcher`]
//! owns its per-match state.

mod ast;
mod compiler;
mod error;
mod iter;
mod lexer;
mod matcher;
mod parser;
mod pattern;
mod token;

pub use compiler::{CompileOptions, DEFAULT_KEY};
pub use error::{MatchError, PatternError};
pub use matcher::{CaptureGroup, Matcher};
pub use pattern::Pattern;
pub use token::{MapToken, Token};
