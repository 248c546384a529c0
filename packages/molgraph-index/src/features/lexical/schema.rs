//! Tantivy Schema Definition
//!
//! # 5-Field Schema
//!
//! 1. `id` - Center entity id (u64, indexed, stored, fast)
//! 2. `mol` - Rendered molecule text (NOT STORED, indexed with the `molecule` analyzer)
//! 3. `sysdata` - Bookkeeping key (keyword)
//! 4. `value` - Bookkeeping value (STORED only)
//! 5. `boost` - Document boost from the configured scorer (f64, fast)
//!
//! Molecule documents carry `id`, `mol` and `boost`; bookkeeping documents
//! carry `sysdata` and `value`.

use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, INDEXED, STORED,
    STRING,
};

// Field name constants (for type-safe access)
pub const FIELD_ID: &str = "id";
pub const FIELD_MOL: &str = "mol";
pub const FIELD_SYSDATA: &str = "sysdata";
pub const FIELD_VALUE: &str = "value";
pub const FIELD_BOOST: &str = "boost";

/// Name under which the index's analyzer is registered
pub const MOLECULE_TOKENIZER: &str = "molecule";

/// Field handles (cached for performance)
#[derive(Debug, Clone)]
pub struct SchemaFields {
    pub schema: Schema,
    pub id: Field,
    pub mol: Field,
    pub sysdata: Field,
    pub value: Field,
    pub boost: Field,
}

impl SchemaFields {
    /// Build the schema from scratch.
    pub fn new() -> Self {
        let mut builder = Schema::builder();

        let id = builder.add_u64_field(FIELD_ID, INDEXED | STORED | FAST);

        let mol_options = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(MOLECULE_TOKENIZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );
        let mol = builder.add_text_field(FIELD_MOL, mol_options);

        let sysdata = builder.add_text_field(FIELD_SYSDATA, STRING);
        let value = builder.add_text_field(FIELD_VALUE, STORED);
        let boost = builder.add_f64_field(FIELD_BOOST, FAST);

        Self {
            schema: builder.build(),
            id,
            mol,
            sysdata,
            value,
            boost,
        }
    }

    /// Look up field handles in the schema of an existing index.
    pub fn from_schema(schema: Schema) -> tantivy::Result<Self> {
        Ok(Self {
            id: schema.get_field(FIELD_ID)?,
            mol: schema.get_field(FIELD_MOL)?,
            sysdata: schema.get_field(FIELD_SYSDATA)?,
            value: schema.get_field(FIELD_VALUE)?,
            boost: schema.get_field(FIELD_BOOST)?,
            schema,
        })
    }
}

impl Default for SchemaFields {
    fn default() -> Self {
        Self::new()
    }
}
