/// A table or memory's size bounds, as encoded in the `limits` descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Initial size, in pages for memory or elements for tables.
    pub initial: u32,
    /// Optional maximum size.
    pub maximum: Option<u32>,
}

/// The kind-dependent payload of an import entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
    /// Kind 0: a function, naming its type index.
    Function(u32),
    /// Kind 1: a table, naming its element reference type and limits.
    Table { elem_type: u8, limits: Limits },
    /// Kind 2: a memory, carrying the initial page count and optional max.
    Memory(Limits),
    /// Kind 3: a global, naming its value type and mutability.
    Global { valtype: u8, mutable: bool },
}

impl ImportKind {
    /// The kind tag byte this variant encodes as.
    #[must_use]
    pub fn tag(&self) -> u8 {
        match self {
            Self::Function(_) => wajic_binfmt::constants::KIND_FUNCTION,
            Self::Table { .. } => wajic_binfmt::constants::KIND_TABLE,
            Self::Memory(_) => wajic_binfmt::constants::KIND_MEMORY,
            Self::Global { .. } => wajic_binfmt::constants::KIND_GLOBAL,
        }
    }
}

/// A single entry of the import section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    /// The import's module name (e.g. `"env"`, `"J"`, `"wasi_snapshot_preview1"`).
    pub module: String,
    /// The import's field name. For `J`-module imports this is the packed
    /// fragment wire form, not a human identifier.
    pub field: String,
    /// The kind-specific descriptor.
    pub kind: ImportKind,
}

impl ImportEntry {
    /// Whether this import's module name is the single character `J`, the
    /// fragment-protocol convention.
    #[must_use]
    pub fn is_fragment_import(&self) -> bool {
        self.module == "J"
    }
}

/// A single entry of the export section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    /// The exported name.
    pub field: String,
    /// The kind tag (0=function, 1=table, 2=memory, 3=global).
    pub kind: u8,
    /// Index into the corresponding index space.
    pub index: u32,
}
