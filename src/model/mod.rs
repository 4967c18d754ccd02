pub mod funcionario;
pub mod registro;
