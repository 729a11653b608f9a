// Symbol/scope index

pub mod names;
pub mod registry;
pub mod scope;
pub mod store;

use serde::{Deserialize, Serialize};

/// Separator between scope names in qualified paths
pub const SCOPE_SEPARATOR: &str = "::";

/// A parsed symbol occurrence (function, variable, type, namespace, enumerator)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub name: String,
    /// Enclosing scope names joined by `::`, empty at global scope
    #[serde(default)]
    pub scope: String,
    pub kind: SymbolKind,
    pub file: String,
    pub line: usize,
    pub column: usize,
    /// Last line of the syntactic extent, when the parser knows it.
    /// Informational; scope spans come from the line heuristic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default)]
    pub is_definition: bool,
    #[serde(default)]
    pub is_declaration: bool,
}

impl SymbolRecord {
    /// Identity across files: `(file, line, column, name)`
    pub fn same_identity(&self, other: &SymbolRecord) -> bool {
        self.line == other.line
            && self.column == other.column
            && self.file == other.file
            && self.name == other.name
    }

    /// Qualified name: scope path plus the bare name
    pub fn qualified_name(&self) -> String {
        if self.scope.is_empty() {
            self.name.clone()
        } else {
            format!("{}{}{}", self.scope, SCOPE_SEPARATOR, self.name)
        }
    }

    /// A declaration that announces the symbol without a body or storage
    pub fn is_pure_declaration(&self) -> bool {
        self.is_declaration && !self.is_definition
    }
}

/// Symbol kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Variable,
    Class,
    Struct,
    Namespace,
    Enum,
    EnumValue,
    Typedef,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Variable => "variable",
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Namespace => "namespace",
            SymbolKind::Enum => "enum",
            SymbolKind::EnumValue => "enum_value",
            SymbolKind::Typedef => "typedef",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "function" => Some(SymbolKind::Function),
            "variable" => Some(SymbolKind::Variable),
            "class" => Some(SymbolKind::Class),
            "struct" => Some(SymbolKind::Struct),
            "namespace" => Some(SymbolKind::Namespace),
            "enum" => Some(SymbolKind::Enum),
            "enum_value" => Some(SymbolKind::EnumValue),
            "typedef" => Some(SymbolKind::Typedef),
            _ => None,
        }
    }

    /// Kinds that open a lexical scope in the scope tree
    pub fn is_scope_bearing(&self) -> bool {
        matches!(
            self,
            SymbolKind::Namespace | SymbolKind::Class | SymbolKind::Struct | SymbolKind::Function
        )
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures of the mutation entry points. Queries never fail.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("file path must not be empty")]
    EmptyPath,

    #[error("index already tracks the maximum of {limit} files")]
    TooManyFiles { limit: usize },

    #[error("{file} has {count} symbols, more than the limit of {limit}")]
    TooManySymbols { file: String, count: usize, limit: usize },
}

/// Parser trait for source languages
pub trait Parser {
    fn can_parse(&self, file_path: &str) -> bool;
    fn parse(&self, content: &str, file_path: &str) -> anyhow::Result<Vec<SymbolRecord>>;
}
