/**
   Translate an analyzed Mica program into LLVM IR.
*/
mod irgen;
mod stringpool;

pub use irgen::IrGen;
