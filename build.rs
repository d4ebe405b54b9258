fn main() {
    // Emits the ESP-IDF link/env configuration when building for the
    // device; a no-op on host-target test builds.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
