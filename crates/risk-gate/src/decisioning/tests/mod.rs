mod common;
mod consensus;
mod engines;
mod evasion;
mod intake;
