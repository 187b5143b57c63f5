/// Default `config.toml` written on first run.
pub(crate) fn default_config_toml() -> String {
    r##"# CareLink Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[backend]
# base_url = "http://localhost:5000"
# user_id = "default_user"
# timeout_secs = 30        # 1-300

[signaling]
# url = "http://localhost:5000"
# display_name = ""        # empty picks User-<n>
# connect_timeout_secs = 15  # 1-120

[ice]
# stun_servers = ["stun:stun.l.google.com:19302", "stun:stun1.l.google.com:19302"]

[voice]
# language = "en-US"       # en-US, es-ES, fr-FR, de-DE, zh-CN, hi-IN
# offline = false
# transcription_url = "https://api.openai.com/v1/audio/transcriptions"
# transcription_api_key = ""
# model = "whisper-1"

[logging]
# level = "carelink=info"
"##
    .to_string()
}
