pub mod apply_service;
pub mod classify_service;
pub mod proposal_service;
pub mod scan_service;
pub mod undo_service;
