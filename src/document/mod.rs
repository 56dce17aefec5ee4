/*!
 * Document block model.
 *
 * A document is represented as an ordered sequence of typed blocks:
 * - `segmenter`: splits raw text into blocks with a line-scanning state machine
 * - `reconstruct`: joins blocks back into text, optionally interleaving translations
 * - `model`: the block type itself and translation injection
 */

pub mod model;
pub mod reconstruct;
pub mod segmenter;

pub use model::{BlockKind, ContentBlock, inject_translations, translatable_indices};
pub use reconstruct::reconstruct;
pub use segmenter::segment;
