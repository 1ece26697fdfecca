pub(crate) mod tensor;
