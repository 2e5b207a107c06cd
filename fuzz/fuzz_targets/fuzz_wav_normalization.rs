#![no_main]

use libfuzzer_sys::fuzz_target;

use connectors::audio::{ensure_wav, PcmFormat, WavHeader, WAV_HEADER_SIZE};

fuzz_target!(|input: (&str, &[u8])| {
    let (mime_type, payload) = input;

    // Mime parsing never panics, whatever the parameters look like.
    let format = PcmFormat::from_mime(mime_type);
    let _ = format.byte_rate();

    let wav = ensure_wav(payload.to_vec(), mime_type).expect("fuzz payloads fit a WAV header");
    if wav.len() != payload.len() {
        // Wrapped: the header must describe exactly the payload.
        assert_eq!(wav.len(), payload.len() + WAV_HEADER_SIZE);
        let header = WavHeader::parse(&wav).expect("wrapped payload has a valid header");
        assert_eq!(header.data_size as usize, payload.len());
        assert_eq!(header.chunk_size as usize, payload.len() + 36);
    }
});
