pub mod fsa;
