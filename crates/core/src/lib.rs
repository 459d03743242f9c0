pub mod intent;
pub mod models;
pub mod normalize;

pub use intent::{
    compose_intent_instruction, intention_response_schema, reconcile_intentions, IntentLabels,
    ReconciledIntentions, UpstreamParseError,
};
pub use models::*;
pub use normalize::{map_role, normalize_contents, validate_request, ValidationError};
