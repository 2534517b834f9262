/// Input collaborators for the enrichment core.
///
/// - `nws`  - active alerts from api.weather.gov (or a saved payload).
/// - `orgs` - the geocoded organization table and its canonical view.

pub mod nws;
pub mod orgs;
