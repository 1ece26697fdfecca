pub(crate) mod similarity;
