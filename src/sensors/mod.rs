//! Analog acquisition: the MCP3008 converter, its software bus, and the
//! ambient light channel built on it.

pub mod bitbang;
pub mod light;
pub mod mcp3008;
