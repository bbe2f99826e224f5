pub mod fixture_workspace;
