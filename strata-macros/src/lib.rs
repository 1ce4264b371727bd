//! Procedural macros for Strata
//!
//! Generated code refers to `strata_core::...`, so these derives are meant to
//! be used through the re-export in `strata-core`.

use proc_macro::TokenStream;

mod inspectable;

/// Derive the accessor table used for dotted-path reads and change tracking
///
/// Every named field becomes an entry keyed by its serialized name. Serde's
/// `rename`, `rename_all`, `skip`, `skip_serializing` and `flatten` are
/// honored; `#[strata(skip)]` hides a field from the table only.
///
/// # Example
///
/// ```rust,ignore
/// use strata_core::prelude::*;
///
/// #[derive(Inspectable, Serialize, Deserialize)]
/// struct Child {
///     #[serde(flatten)]
///     base: DocumentBase,
///     #[serde(rename = "childProp")]
///     child_prop: String,
///     #[serde(skip)]
///     #[strata(skip)]
///     tracker: DiffTracker,
/// }
/// ```
#[proc_macro_derive(Inspectable, attributes(strata))]
pub fn derive_inspectable(input: TokenStream) -> TokenStream {
    inspectable::derive_inspectable(input.into()).into()
}
