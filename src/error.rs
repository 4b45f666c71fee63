//! Error types for the flow field renderer.
//!
//! Every fallible operation in the crate returns [`Result`], whose error side is
//! [`FlowFieldError`]. GPU setup, shader compilation, uniform binding and parameter
//! validation all report through the same enum so the render loop can decide
//! once what is fatal.

use thiserror::Error;

use crate::program::UniformKind;

/// Errors produced by the flow field engine and its viewer.
#[derive(Debug, Error)]
pub enum FlowFieldError {
    /// No compatible GPU adapter found.
    #[error("No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support.")]
    NoAdapter,

    /// Failed to create GPU device.
    #[error("Failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),

    /// Failed to create a surface for rendering.
    #[error("Failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    /// The surface could not provide a frame.
    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    /// A texture or buffer allocation was rejected by the device.
    #[error("Failed to create {what}: {reason}")]
    ResourceCreation { what: String, reason: String },

    /// WGSL source was rejected by the shader compiler.
    #[error("Shader compilation failed for program '{program}':\n{diagnostic}")]
    ShaderCompile { program: String, diagnostic: String },

    /// Vertex and fragment stages could not be linked into a pipeline.
    #[error("Pipeline creation failed for program '{program}':\n{diagnostic}")]
    PipelineLink { program: String, diagnostic: String },

    /// A uniform was given a value of the wrong type.
    #[error("Uniform '{name}' in program '{program}' is {expected} but was given {found}")]
    UniformTypeMismatch {
        program: String,
        name: String,
        expected: UniformKind,
        found: UniformKind,
    },

    /// A uniform name that the program does not declare.
    #[error("Program '{program}' has no uniform named '{name}'")]
    UnknownUniform { program: String, name: String },

    /// A declared uniform that was never given a value.
    #[error("Uniform '{name}' in program '{program}' has no value")]
    MissingUniform { program: String, name: String },

    /// A vertex attribute whose format has no WGSL counterpart here.
    #[error("Attribute '{name}' in program '{program}' uses unsupported format {format:?}")]
    UnsupportedAttribute {
        program: String,
        name: String,
        format: wgpu::VertexFormat,
    },

    /// A structural parameter outside what the device can allocate.
    #[error("{name} = {value} is outside the supported range {min}..={max}")]
    ParameterOutOfRange {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    /// Failed to map a read-back buffer.
    #[error("Failed to map GPU buffer: {0}")]
    BufferMapping(String),

    /// The surface reports no texture format the adapter can render to.
    #[error("Surface has no supported texture format for this adapter")]
    NoSurfaceFormat,

    /// Event loop creation or execution failed.
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// Window creation failed.
    #[error("Window creation error: {0}")]
    Window(#[from] winit::error::OsError),
}

/// Crate-wide result alias.
pub type Result<T, E = FlowFieldError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_error_message() {
        let err = FlowFieldError::ParameterOutOfRange {
            name: "numLines",
            value: 0,
            min: 1,
            max: 8192,
        };
        assert_eq!(
            err.to_string(),
            "numLines = 0 is outside the supported range 1..=8192"
        );
    }

    #[test]
    fn test_no_surface_format_message() {
        let err = FlowFieldError::NoSurfaceFormat;
        assert!(err.to_string().contains("no supported texture format"));
        assert!(!err.to_string().contains("adapter found"));
    }

    #[test]
    fn test_type_mismatch_message_names_both_types() {
        let err = FlowFieldError::UniformTypeMismatch {
            program: "trace".into(),
            name: "step_size".into(),
            expected: UniformKind::F32,
            found: UniformKind::Vec2,
        };
        let msg = err.to_string();
        assert!(msg.contains("step_size"));
        assert!(msg.contains("f32"));
        assert!(msg.contains("vec2<f32>"));
    }
}
