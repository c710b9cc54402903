pub mod admin_gate;
pub mod flash;
pub mod hash;
pub mod method_override;
pub mod session;
pub mod track_visitor;
pub mod upload;
pub mod validation;
