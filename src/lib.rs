// src/lib.rs

//! Procedural isosurface terrain: density-field sampling, marching-cubes
//! meshing, chunk streaming around a moving player, and sphere-vs-mesh
//! collision. Rendering and input stay outside; the crate hands loaded
//! chunk meshes (plus their world translation) to whatever backend draws
//! them and consumes already-decoded control input per tick.

pub mod coords;
pub mod field;
pub mod grid;
pub mod mesh;
pub mod mesher;
pub mod chunk;
pub mod world;
pub mod player;
pub mod collision;
pub mod sim;
pub mod prelude;
