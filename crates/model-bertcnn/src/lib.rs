//! BERT-CNN: классификатор румынской диакритики на Candle.
//!
//! BERT кодирует предложения целиком, а CNN кодирует символьные окна вокруг
//! каждой диакритической позиции. Для каждого окна признаки токена,
//! которому принадлежит позиция, склеиваются с признаками окна и
//! проецируются на 5 классов диакритики.

pub mod char_cnn;
pub mod config;
pub mod model;

pub use config::BertCnnConfig;
pub use model::BertCnnModel;
