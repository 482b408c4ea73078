pub(crate) mod dimen;
pub(crate) mod engine;
pub(crate) mod extract;
pub(crate) mod icon;
pub(crate) mod path_helpers;
pub(crate) mod resolve;
pub(crate) mod show;
pub(crate) mod values;

pub(crate) use dimen::command_dimen;
pub(crate) use extract::command_extract;
pub(crate) use icon::command_icon;
pub(crate) use resolve::command_resolve;
pub(crate) use show::command_show;
pub(crate) use values::command_values;
