//! Reference resolver
//!
//! After the root compile, the registry may reference locations whose
//! documents were never seen. The resolver drives the loader callback over
//! those locations until a full pass loads nothing new. Forward references
//! inside freshly compiled documents are wired by the registry's `insert`;
//! whatever stays unresolved afterwards is a dangling reference, reported
//! at validation time.

use tracing::debug;

use crate::compiler;
use crate::error::{BuildError, Result};
use crate::registry::SchemaRegistry;
use crate::uri::SchemaUri;
use crate::SchemaLoader;

pub(crate) fn resolve_external(
    registry: &mut SchemaRegistry,
    loader: Option<&SchemaLoader>,
) -> Result<()> {
    loop {
        let mut loaded = false;

        // The registry grows while documents compile; snapshot the
        // locations before each pass.
        for location in registry.locations() {
            if !registry.needs_loading(&location) {
                continue;
            }
            let Some(loader) = loader else {
                return Err(BuildError::ExternalRefWithoutLoader { location });
            };

            debug!(location = %location, "loading external schema document");
            let uri = SchemaUri::parse(&location);
            let document =
                loader(&uri).map_err(|source| BuildError::loader(location.clone(), source))?;
            compiler::compile(&document, &[], vec![uri], registry)?;
            loaded = true;
        }

        if !loaded {
            return Ok(());
        }
    }
}
