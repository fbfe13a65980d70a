pub mod challenge_service;
pub mod identity_service;
pub mod public_key;
pub mod ton_proof_service;
pub mod token_service;
pub mod tonapi_client;
