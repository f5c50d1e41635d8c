//! Result column descriptors and declared-type classification.

/// Coercion category derived from a column's declared type.
///
/// Declared types are free-form (`"DateTime"`, `"DECIMAL(3,2)"`,
/// `"boolean not null"`), so they are normalized once at prepare time and
/// the row decoder switches on this enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// No declared type (expressions, aggregates). Values pass through.
    Untyped,
    /// `BOOLEAN`: integers decode as `true`/`false`.
    Boolean,
    /// `DATE`: `YYYY-MM-DD` text.
    Date,
    /// `TIME`: `HH:MM:SS[.FFFFFF]` text.
    Time,
    /// `DATETIME` or `TIMESTAMP`: date and time text.
    DateTime,
    /// `DECIMAL(p,s)` or `NUMERIC(p,s)`.
    Decimal {
        /// Declared total digits, when given.
        precision: Option<u32>,
        /// Declared fractional digits, when given.
        scale: Option<u32>,
    },
    /// Any other declared type; values pass through. Holds the normalized
    /// (lower-case, annotation-free) name.
    Other(String),
}

impl ColumnType {
    /// Classifies an engine-declared type.
    ///
    /// Checks run in order on the lower-cased name before any `(`:
    /// `datetime`, `date`, `time`, `decimal`, `bool`. `timestamp` counts as
    /// a datetime rather than a time, and `numeric` as a decimal rather than
    /// a passthrough type.
    #[must_use]
    pub fn from_decl(decl: Option<&str>) -> Self {
        let Some(decl) = decl.map(str::trim).filter(|d| !d.is_empty()) else {
            return Self::Untyped;
        };
        let lower = decl.to_ascii_lowercase();
        let (base, annotation) = match lower.split_once('(') {
            Some((base, rest)) => (base.trim(), rest.split(')').next()),
            None => (lower.as_str(), None),
        };

        if base.contains("datetime") || base.contains("timestamp") {
            Self::DateTime
        } else if base.contains("date") {
            Self::Date
        } else if base.contains("time") {
            Self::Time
        } else if base.contains("decimal") || base.contains("numeric") {
            let (precision, scale) = annotation.map_or((None, None), precision_scale);
            Self::Decimal { precision, scale }
        } else if base.contains("bool") {
            Self::Boolean
        } else {
            Self::Other(base.to_string())
        }
    }
}

/// Parses the `p` or `p,s` inside a type annotation.
fn precision_scale(annotation: &str) -> (Option<u32>, Option<u32>) {
    let mut parts = annotation.split(',').map(|p| p.trim().parse::<u32>().ok());
    let precision = parts.next().flatten();
    let scale = parts.next().flatten();
    (precision, scale)
}

/// Name and declared type of one result column, captured at prepare time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    decl_type: Option<String>,
    kind: ColumnType,
}

impl Column {
    /// Creates a descriptor, classifying `decl_type`.
    #[must_use]
    pub fn new(name: impl Into<String>, decl_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnType::from_decl(decl_type),
            decl_type: decl_type.map(str::to_string),
        }
    }

    /// Column name (alias if the query gave one).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type as reported by the engine, if any.
    #[must_use]
    pub fn decl_type(&self) -> Option<&str> {
        self.decl_type.as_deref()
    }

    /// Coercion category.
    #[must_use]
    pub const fn kind(&self) -> &ColumnType {
        &self.kind
    }
}
