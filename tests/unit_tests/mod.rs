mod comm;
mod config;
mod material;
mod quadrature;
mod space;
