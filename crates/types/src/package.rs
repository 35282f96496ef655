//! Package (module definition) types.
//!
//! A package bundles the modules a block stream server executes and the type
//! descriptors needed to decode their outputs.
//!
//! # Example YAML
//!
//! ```yaml
//! network: mainnet
//! modules:
//!   - name: map_block_meta
//!     kind: map
//!     output_type: sf.substreams.BlockMeta
//!     inputs:
//!       - type: params
//!         value: Range 100000 - 100009
//!       - type: source
//!         name: sf.ethereum.type.v2.Block
//! types:
//!   - name: sf.substreams.BlockMeta
//!     fields:
//!       - name: number
//!         kind: uint64
//!       - name: hash
//!         kind: string
//! ```

use serde::{Deserialize, Serialize};

/// A compiled package: modules plus the types their outputs are encoded with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// Network the package targets, if declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    /// Modules, in declaration order
    #[serde(default)]
    pub modules: Vec<Module>,

    /// Type descriptors used to decode module outputs
    #[serde(default)]
    pub types: Vec<TypeDescriptor>,
}

impl Package {
    /// Find a module by name
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Find a module by name, mutably
    pub fn module_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.modules.iter_mut().find(|m| m.name == name)
    }

    /// Find a type descriptor by its fully qualified name
    pub fn type_descriptor(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    #[default]
    Map,
    Store,
}

/// A named unit of transformation logic, parameterizable at request time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,

    #[serde(default)]
    pub kind: ModuleKind,

    #[serde(default)]
    pub inputs: Vec<ModuleInput>,

    /// Fully qualified output type, e.g. `sf.substreams.BlockMeta`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,
}

impl Module {
    /// Current parameter string, when the module's first input is a params input
    pub fn params(&self) -> Option<&str> {
        match self.inputs.first() {
            Some(ModuleInput::Params { value }) => Some(value.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModuleInput {
    /// Runtime parameter string
    Params { value: String },
    /// Raw chain source, e.g. a block type
    Source { name: String },
    /// Output of another map module
    Map { module_name: String },
    /// Content of a store module
    Store { module_name: String },
}

/// Describes the shape of a decoded output message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Fully qualified message name
    pub name: String,

    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,

    pub kind: FieldKind,

    #[serde(default)]
    pub repeated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Int64,
    Uint64,
    Int32,
    Uint32,
    Bool,
    Double,
    /// Base64 encoded bytes
    Bytes,
    /// Nested message, by fully qualified type name
    Message(String),
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::String => write!(f, "string"),
            FieldKind::Int64 => write!(f, "int64"),
            FieldKind::Uint64 => write!(f, "uint64"),
            FieldKind::Int32 => write!(f, "int32"),
            FieldKind::Uint32 => write!(f, "uint32"),
            FieldKind::Bool => write!(f, "bool"),
            FieldKind::Double => write!(f, "double"),
            FieldKind::Bytes => write!(f, "bytes"),
            FieldKind::Message(name) => write!(f, "message {}", name),
        }
    }
}
