//! Input/Output: quantification files, mapping and metadata tables

mod csv;
mod quant;
mod tx2gene;

pub(crate) use self::csv::{commented_reader, delimited_reader};
pub use self::csv::{read_metadata, write_matrix};
pub use quant::{find_quant_file, read_quant_file, QuantFormat};
pub use tx2gene::{normalize_id, read_tx2gene, TxToGene};
