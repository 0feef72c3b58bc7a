pub mod impulse_loader;
