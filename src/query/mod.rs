//! Query understanding: script normalization, volume extraction and alias
//! resolution.

pub mod alias;
pub mod kana;
pub mod normalize;
pub mod volume;

pub use alias::{AliasResolution, AliasTable, AliasTier};
pub use kana::{fold_for_match, fullwidth_digits_to_ascii, normalize_kana};
pub use normalize::{NormalizedQuery, ParsedQuery, QueryNormalizer, QueryRejection};
pub use volume::{MAX_QUERY_VOLUME, MAX_TITLE_VOLUME, VolumeMatch, extract_volume};
