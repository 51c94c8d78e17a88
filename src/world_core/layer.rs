/// One stage of the generation pipeline. Stages are pure: the same input
/// always produces the same output.
pub trait Layer<I, O> {
    fn generate(&self, input: I) -> O;
}
