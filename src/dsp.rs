pub mod fft;
pub mod frame;
pub mod gain;
pub mod spectrum;
pub mod window;

pub trait Reconfigurable<Cfg> {
    type Error;

    fn update_config(&mut self, config: Cfg) -> Result<(), Self::Error>;
}
