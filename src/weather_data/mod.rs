pub mod observation_loader;
