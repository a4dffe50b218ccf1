pub mod toml_loader;

pub use toml_loader::{load_all_projects, load_toml_to_project, load_txt_to_project};
