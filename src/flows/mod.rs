//! Authentication Flows
//!
//! OIDC authorization-code flow used to sign operators in.

pub mod authorization_code;

pub use authorization_code::{
    create_mock_authorization_code_flow, AuthorizationCodeFlow, AuthorizationCodeFlowImpl,
    MockAuthorizationCodeFlow,
};
