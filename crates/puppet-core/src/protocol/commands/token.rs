//! Token command

use crate::protocol::error::DecodeError;
use crate::protocol::stream::{WireFormat, WireReader, WireWriter};
use std::fmt;

/// A named, numbered marker the designer sends to the worker and gets back.
///
/// Views use tokens to correlate work they requested with the worker's
/// answer, for example a preview refresh for a set of instances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenCommand {
    token_name: String,
    token_number: i32,
    instance_ids: Vec<i32>,
}

impl TokenCommand {
    pub fn new(token_name: impl Into<String>, token_number: i32, instance_ids: Vec<i32>) -> Self {
        Self {
            token_name: token_name.into(),
            token_number,
            instance_ids,
        }
    }

    pub fn token_name(&self) -> &str {
        &self.token_name
    }

    pub fn token_number(&self) -> i32 {
        self.token_number
    }

    pub fn instance_ids(&self) -> &[i32] {
        &self.instance_ids
    }

    /// Orders the instance ids ascending
    pub fn sort(&mut self) {
        self.instance_ids.sort_unstable();
    }
}

impl WireFormat for TokenCommand {
    const NAME: &'static str = "Token";

    fn write_to(&self, out: &mut WireWriter) {
        out.put_str(&self.token_name);
        out.put_i32(self.token_number);
        out.put_ids(&self.instance_ids);
    }

    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            token_name: input.get_string("tokenName")?,
            token_number: input.get_i32("tokenNumber")?,
            instance_ids: input.get_ids("instanceIds")?,
        })
    }
}

impl fmt::Display for TokenCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TokenCommand(tokenName: {}, tokenNumber: {}, instances: {:?})",
            self.token_name, self.token_number, self.instance_ids
        )
    }
}
