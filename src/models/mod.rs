pub mod change_log;
pub mod drive_item;
pub mod preferences;
pub mod proposal;
pub mod scan;
