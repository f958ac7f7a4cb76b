pub mod scenario_editor;
