use serde::{Deserialize, Serialize};
use std::fmt;

/// A symbol file request as issued by a debugger: `{file_name}/{signature}/...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRequest {
    pub file_name: String,
    pub signature: String,
}

impl SymbolRequest {
    /// Builds a request, rejecting shapes that cannot carry a guid.
    ///
    /// The signature must hold at least one guid character plus the
    /// trailing debug-type discriminator.
    pub fn new(file_name: impl Into<String>, signature: impl Into<String>) -> Option<Self> {
        let file_name = file_name.into();
        let signature = signature.into();
        if file_name.is_empty() || signature.chars().count() < 2 {
            return None;
        }
        Some(Self {
            file_name,
            signature,
        })
    }

    /// The signature without its last character, which encodes the debug-info type.
    pub fn guid(&self) -> &str {
        let mut chars = self.signature.chars();
        chars.next_back();
        chars.as_str()
    }

    /// The debug-info type discriminator.
    pub fn debug_type(&self) -> Option<char> {
        self.signature.chars().last()
    }

    pub fn composite_key(&self) -> String {
        symbol_key(self.guid(), &self.file_name)
    }
}

impl fmt::Display for SymbolRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.file_name, self.signature)
    }
}

/// Primary metadata index key for a symbol file.
///
/// Indexers must publish entries under exactly this key for lookups to hit.
pub fn symbol_key(guid: &str, file_name: &str) -> String {
    format!(
        "{}/{}",
        guid.to_ascii_lowercase(),
        file_name.to_ascii_lowercase()
    )
}
