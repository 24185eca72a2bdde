/// Contains the reference CPU implementation of the kernels.
pub mod cpu;
/// Contains the `Device` and `DeviceBuffer` APIs.
pub mod device;
/// Contains the dense- and sparse-label cross-entropy operators,
/// as well as the device-generic test suite.
pub mod loss;
/// Contains random test-vector helpers.
pub mod rng;
/// Contains the matrix and label containers.
pub mod tensor;
