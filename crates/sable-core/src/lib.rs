//! sable-core — couche de données de la VM Sable
//!
//! Fournit :
//! - `memory` : le point unique d'allocation (`reallocate`), la politique de
//!   croissance, la comptabilité du tas par thread et le hook pour un futur GC
//! - `DynArray<T>` : tableau dynamique dont tout le stockage passe par `memory`
//! - `Value` / `ValuePool` : valeur scalaire (f64) et pool de constantes
//! - `bytecode` : `Chunk` (octets + lignes + constantes), `OpCode`,
//!   désassembleur et validation
//! - Erreurs `ChunkError` + alias `CoreResult<T>`
//!
//! Features :
//! - `tracing` (par défaut) : traces sur grow/shrink/free
//! - `serde` : derive `Serialize` sur les vues utiles à l'outillage
//!
//! Exemple :
//!
//! ```
//! use sable_core::prelude::*;
//!
//! let mut chunk = Chunk::new();
//! let idx = chunk.add_constant(1.2);
//! chunk.write_op(OpCode::Constant, 123);
//! chunk.write_byte(idx as u8, 123);
//! chunk.write_op(OpCode::Return, 123);
//!
//! assert!(disassemble_chunk(&chunk, "test chunk").contains("OP_CONSTANT         0 '1.2'"));
//! chunk.free();
//! assert!(chunk.is_empty());
//! ```

#![deny(missing_docs)]

/* ─────────────────────────── Modules publics ─────────────────────────── */

/// Point unique d'allocation et comptabilité du tas.
pub mod memory;
/// Tableau dynamique adossé au point d'allocation.
pub mod array;
/// Valeurs et pool de constantes.
pub mod value;
/// Primitives de bytecode (chunk, opcodes, désassembleur, validation).
pub mod bytecode;

/// Compatibilité : ré-exporte le désassembleur textuel.
pub use bytecode::disasm;
/// Compatibilité : ré-exporte les helpers de validation.
pub use bytecode::helpers;

pub use array::DynArray;
pub use bytecode::{Chunk, ChunkError, OpCode};
pub use value::{print_value, Value, ValuePool};

/* ─────────────────────────── Résultat commun ─────────────────────────── */

/// Alias résultat commun au core.
pub type CoreResult<T> = core::result::Result<T, ChunkError>;

/* ─────────────────────────── Prélude ─────────────────────────── */

/// Prélude pratique pour importer les types/funcs clés du crate.
pub mod prelude {
    /// Réexports utiles pour une importation rapide.
    pub use super::{
        bytecode::{decode, disassemble_chunk, disassemble_instruction, validate_chunk, CodeUnit, Instruction},
        memory::{stats, HeapStats},
        print_value, Chunk, ChunkError, CoreResult, DynArray, OpCode, Value, ValuePool,
    };
}

/* ─────────────────────────── Tests ─────────────────────────── */
