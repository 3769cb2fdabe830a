//! Host Commands Module
//!
//! 호스트 UI 레이어에서 호출 가능한 명령어 정의

pub mod secrets;
