pub mod fixtures;
pub mod mocks;

pub use mocks::{
    GeneratorCall, HttpCall, RecordingObserver, RecordingRenderer, RenderCall, ScriptedGenerator,
    ScriptedOperator, StaticStructurer, StubHttpCaller,
};
