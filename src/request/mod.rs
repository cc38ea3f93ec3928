pub mod descriptor;
pub mod dispatcher;
