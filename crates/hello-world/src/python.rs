use crate::ext::Greeter;
use pyo3::prelude::*;
use std::collections::BTreeMap;

#[pyclass(name = "Greeter")]
struct PyGreeter {
    inner: Greeter,
}

#[pymethods]
impl PyGreeter {
    #[new]
    fn new() -> Self {
        Self {
            inner: Greeter::new(),
        }
    }

    fn simple_greet(&self) -> String {
        self.inner.simple_greet()
    }

    fn complex_greet(&self, names: Vec<String>, common_message: &str) -> BTreeMap<String, String> {
        self.inner.complex_greet(&names, common_message)
    }
}

#[pymodule]
fn ext(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyGreeter>()?;
    Ok(())
}
